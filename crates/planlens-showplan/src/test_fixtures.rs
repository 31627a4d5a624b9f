//! Showplan documents shared by the unit tests

use indoc::indoc;

use crate::showplan::{ParsedPlan, parse_showplan};

/// Parses a fixture, panicking with the parser error on failure
pub(crate) fn parse(xml: &str) -> ParsedPlan {
    match parse_showplan(xml) {
        Ok(plan) => plan,
        Err(e) => panic!("fixture failed to parse: {e}"),
    }
}

/// One statement whose root is a leaf table scan
pub(crate) const SINGLE_SCAN: &str = indoc! {r#"
    <?xml version="1.0" encoding="utf-8"?>
    <ShowPlanXML xmlns="http://schemas.microsoft.com/sqlserver/2004/07/showplan" Version="1.564" Build="16.0.1000.6">
      <BatchSequence>
        <Batch>
          <Statements>
            <StmtSimple StatementText="SELECT * FROM dbo.AuditLog" StatementId="1" StatementCompId="1" StatementType="SELECT" StatementSubTreeCost="0.0032831" StatementEstRows="1" StatementOptmLevel="TRIVIAL" QueryHash="0x1D3F7A1E2B44C9F0" QueryPlanHash="0x6A0B3C2D1E4F5A6B" CardinalityEstimationModelVersion="160">
              <StatementSetOptions ANSI_NULLS="true" ANSI_PADDING="true" ARITHABORT="true" QUOTED_IDENTIFIER="true" />
              <QueryPlan CachedPlanSize="16" CompileTime="0" CompileCPU="0" CompileMemory="88">
                <OptimizerHardwareDependentProperties EstimatedAvailableMemoryGrant="419417" EstimatedPagesCached="104854" EstimatedAvailableDegreeOfParallelism="4" MaxCompileMemory="3421328" />
                <RelOp NodeId="0" PhysicalOp="Table Scan" LogicalOp="Table Scan" EstimateRows="1" EstimateIO="0.003125" EstimateCPU="0.0001581" AvgRowSize="61" EstimatedTotalSubtreeCost="0.0032831" TableCardinality="1" Parallel="0" EstimateRebinds="0" EstimateRewinds="0" EstimatedExecutionMode="Row">
                  <OutputList>
                    <ColumnReference Database="[Ops]" Schema="[dbo]" Table="[AuditLog]" Column="AuditID" />
                    <ColumnReference Database="[Ops]" Schema="[dbo]" Table="[AuditLog]" Column="Message" />
                  </OutputList>
                  <TableScan Ordered="0" ForcedIndex="0" ForceScan="0" NoExpandHint="0" Storage="RowStore">
                    <DefinedValues />
                    <Object Database="[Ops]" Schema="[dbo]" Table="[AuditLog]" IndexKind="Heap" Storage="RowStore" />
                  </TableScan>
                </RelOp>
              </QueryPlan>
            </StmtSimple>
          </Statements>
        </Batch>
      </BatchSequence>
    </ShowPlanXML>
"#};

/// Estimated plan: a hash join over two scans, with a missing index and
/// statement and operator warnings
pub(crate) const HASH_JOIN: &str = indoc! {r#"
    <ShowPlanXML xmlns="http://schemas.microsoft.com/sqlserver/2004/07/showplan" Version="1.564" Build="16.0.1000.6">
      <BatchSequence>
        <Batch>
          <Statements>
            <StmtSimple StatementText="SELECT o.OrderID, c.Name FROM dbo.Orders o JOIN dbo.Customers c ON c.CustomerID = o.CustomerID WHERE c.Code = @code" StatementId="1" StatementCompId="2" StatementType="SELECT" StatementSubTreeCost="4" StatementEstRows="1200" StatementOptmLevel="FULL" StatementOptmEarlyAbortReason="GoodEnoughPlanFound">
              <QueryPlan DegreeOfParallelism="1" NonParallelPlanReason="MaxDOPSetToOne" MemoryGrant="1536" CachedPlanSize="40" CompileTime="3" CompileCPU="3" CompileMemory="312">
                <MissingIndexes>
                  <MissingIndexGroup Impact="62.5">
                    <MissingIndex Database="[Sales]" Schema="[dbo]" Table="[Orders]">
                      <ColumnGroup Usage="EQUALITY">
                        <Column Name="[CustomerID]" ColumnId="2" />
                      </ColumnGroup>
                      <ColumnGroup Usage="INCLUDE">
                        <Column Name="[OrderDate]" ColumnId="3" />
                      </ColumnGroup>
                    </MissingIndex>
                  </MissingIndexGroup>
                </MissingIndexes>
                <Warnings>
                  <PlanAffectingConvert ConvertIssue="Seek Plan" Expression="CONVERT_IMPLICIT(nvarchar(20),[c].[Code],0)=[@code]" />
                </Warnings>
                <MemoryGrantInfo SerialRequiredMemory="1024" SerialDesiredMemory="1536" />
                <UnknownFutureThing Flavor="vanilla" />
                <TraceFlags IsCompileTime="1">
                  <TraceFlag Value="4199" Scope="Global" />
                </TraceFlags>
                <RelOp NodeId="0" PhysicalOp="Hash Match" LogicalOp="Inner Join" EstimateRows="1200" EstimateIO="0" EstimateCPU="1.8" AvgRowSize="70" EstimatedTotalSubtreeCost="4" Parallel="0" EstimateRebinds="0" EstimateRewinds="0" FutureRelOpAttribute="42">
                  <OutputList>
                    <ColumnReference Database="[Sales]" Schema="[dbo]" Table="[Orders]" Alias="[o]" Column="OrderID" />
                    <ColumnReference Database="[Sales]" Schema="[dbo]" Table="[Customers]" Alias="[c]" Column="Name" />
                  </OutputList>
                  <Warnings NoJoinPredicate="false" />
                  <MemoryFractions Input="1" Output="1" />
                  <Hash>
                    <DefinedValues />
                    <HashKeysBuild>
                      <ColumnReference Database="[Sales]" Schema="[dbo]" Table="[Orders]" Alias="[o]" Column="CustomerID" />
                    </HashKeysBuild>
                    <HashKeysProbe>
                      <ColumnReference Database="[Sales]" Schema="[dbo]" Table="[Customers]" Alias="[c]" Column="CustomerID" />
                    </HashKeysProbe>
                    <ProbeResidual>
                      <ScalarOperator ScalarString="[Sales].[dbo].[Customers].[CustomerID] as [c].[CustomerID]=[Sales].[dbo].[Orders].[CustomerID] as [o].[CustomerID]" />
                    </ProbeResidual>
                    <RelOp NodeId="1" PhysicalOp="Clustered Index Scan" LogicalOp="Clustered Index Scan" EstimateRows="50000" EstimateIO="0.8" EstimateCPU="0.2" AvgRowSize="19" EstimatedTotalSubtreeCost="1" TableCardinality="50000" Parallel="0" EstimateRebinds="0" EstimateRewinds="0">
                      <OutputList>
                        <ColumnReference Database="[Sales]" Schema="[dbo]" Table="[Orders]" Alias="[o]" Column="OrderID" />
                        <ColumnReference Database="[Sales]" Schema="[dbo]" Table="[Orders]" Alias="[o]" Column="CustomerID" />
                      </OutputList>
                      <IndexScan Ordered="0" ForcedIndex="0" ForceScan="0" NoExpandHint="0" Storage="RowStore">
                        <DefinedValues />
                        <Object Database="[Sales]" Schema="[dbo]" Table="[Orders]" Index="[PK_Orders]" Alias="[o]" IndexKind="Clustered" Storage="RowStore" />
                      </IndexScan>
                    </RelOp>
                    <RelOp NodeId="2" PhysicalOp="Index Scan" LogicalOp="Index Scan" EstimateRows="300" EstimateIO="0.3" EstimateCPU="0.2" AvgRowSize="40" EstimatedTotalSubtreeCost="0.5" TableCardinality="9000" Parallel="0" EstimateRebinds="0" EstimateRewinds="0">
                      <OutputList>
                        <ColumnReference Database="[Sales]" Schema="[dbo]" Table="[Customers]" Alias="[c]" Column="CustomerID" />
                        <ColumnReference Database="[Sales]" Schema="[dbo]" Table="[Customers]" Alias="[c]" Column="Name" />
                      </OutputList>
                      <Warnings>
                        <ColumnsWithNoStatistics>
                          <ColumnReference Database="[Sales]" Schema="[dbo]" Table="[Customers]" Column="Code" />
                        </ColumnsWithNoStatistics>
                      </Warnings>
                      <IndexScan Ordered="0" ForcedIndex="0" ForceScan="0" NoExpandHint="0" Storage="RowStore">
                        <DefinedValues />
                        <Object Database="[Sales]" Schema="[dbo]" Table="[Customers]" Index="[IX_Customers_Name]" Alias="[c]" IndexKind="NonClustered" Storage="RowStore" />
                        <Predicate>
                          <ScalarOperator ScalarString="CONVERT_IMPLICIT(nvarchar(20),[Sales].[dbo].[Customers].[Code] as [c].[Code],0)=[@code]" />
                        </Predicate>
                      </IndexScan>
                    </RelOp>
                  </Hash>
                </RelOp>
                <ParameterList>
                  <ColumnReference Column="@code" ParameterDataType="nvarchar(20)" ParameterCompiledValue="N'ACME'" />
                </ParameterList>
              </QueryPlan>
            </StmtSimple>
          </Statements>
        </Batch>
      </BatchSequence>
    </ShowPlanXML>
"#};

/// Actual plan: a spilling sort over a seek, with two threads of runtime
/// counters on the sort
pub(crate) const ACTUAL_SORT_SPILL: &str = indoc! {r#"
    <ShowPlanXML xmlns="http://schemas.microsoft.com/sqlserver/2004/07/showplan" Version="1.564" Build="16.0.1000.6">
      <BatchSequence>
        <Batch>
          <Statements>
            <StmtSimple StatementText="SELECT OrderID, OrderDate FROM dbo.Orders WHERE OrderID &gt;= @from ORDER BY OrderDate DESC" StatementId="1" StatementCompId="1" StatementType="SELECT" StatementSubTreeCost="2" StatementEstRows="1000" RetrievedFromCache="true">
              <QueryPlan DegreeOfParallelism="2" MemoryGrant="1024" CachedPlanSize="32" CompileTime="2" CompileCPU="2" CompileMemory="256">
                <ThreadStat Branches="1" UsedThreads="2">
                  <ThreadReservation NodeGroup="0" ReservedThreads="2" />
                </ThreadStat>
                <Warnings>
                  <MemoryGrantWarning GrantWarningKind="Excessive Grant" RequestedMemory="8192" GrantedMemory="8192" MaxUsedMemory="1024" />
                </Warnings>
                <MemoryGrantInfo SerialRequiredMemory="512" SerialDesiredMemory="8192" RequiredMemory="1024" DesiredMemory="8192" RequestedMemory="8192" GrantWaitTime="0" GrantedMemory="8192" MaxUsedMemory="1024" MaxQueryMemory="1320960" />
                <WaitStats>
                  <Wait WaitType="IO_COMPLETION" WaitTimeMs="12" WaitCount="30" />
                  <Wait WaitType="SOS_SCHEDULER_YIELD" WaitTimeMs="1" WaitCount="4" />
                </WaitStats>
                <QueryTimeStats CpuTime="65" ElapsedTime="58" />
                <RelOp NodeId="0" PhysicalOp="Sort" LogicalOp="Sort" EstimateRows="1000" EstimateIO="0.01" EstimateCPU="0.09" AvgRowSize="19" EstimatedTotalSubtreeCost="2" Parallel="1" EstimateRebinds="0" EstimateRewinds="0">
                  <OutputList>
                    <ColumnReference Database="[Sales]" Schema="[dbo]" Table="[Orders]" Column="OrderID" />
                    <ColumnReference Database="[Sales]" Schema="[dbo]" Table="[Orders]" Column="OrderDate" />
                  </OutputList>
                  <Warnings>
                    <SpillToTempDb SpillLevel="1" SpilledThreadCount="2" />
                    <SortSpillDetails GrantedMemoryKb="1024" UsedMemoryKb="1024" WritesToTempDb="120" ReadsFromTempDb="118" />
                    <FancyNewWarning Reason="made up" />
                  </Warnings>
                  <MemoryFractions Input="1" Output="1" />
                  <RunTimeInformation>
                    <RunTimeCountersPerThread Thread="1" ActualRows="600" ActualRebinds="1" ActualRewinds="0" ActualEndOfScans="1" ActualExecutions="1" ActualElapsedms="40" ActualCPUms="30" InputMemoryGrant="512" OutputMemoryGrant="0" UsedMemoryGrant="512" ActualExecutionMode="Row" />
                    <RunTimeCountersPerThread Thread="2" ActualRows="400" ActualRebinds="1" ActualRewinds="0" ActualEndOfScans="1" ActualExecutions="1" ActualElapsedms="55" ActualCPUms="35" InputMemoryGrant="512" OutputMemoryGrant="0" UsedMemoryGrant="512" ActualExecutionMode="Row" />
                  </RunTimeInformation>
                  <Sort Distinct="0">
                    <OrderBy>
                      <OrderByColumn Ascending="0">
                        <ColumnReference Database="[Sales]" Schema="[dbo]" Table="[Orders]" Column="OrderDate" />
                      </OrderByColumn>
                    </OrderBy>
                    <RelOp NodeId="1" PhysicalOp="Clustered Index Seek" LogicalOp="Clustered Index Seek" EstimateRows="1000" EstimateIO="0.9" EstimateCPU="0.1" AvgRowSize="19" EstimatedTotalSubtreeCost="1" TableCardinality="50000" Parallel="1" EstimateRebinds="0" EstimateRewinds="0" EstimatedRowsRead="1000">
                      <OutputList>
                        <ColumnReference Database="[Sales]" Schema="[dbo]" Table="[Orders]" Column="OrderID" />
                        <ColumnReference Database="[Sales]" Schema="[dbo]" Table="[Orders]" Column="OrderDate" />
                      </OutputList>
                      <RunTimeInformation>
                        <RunTimeCountersPerThread Thread="1" ActualRows="1000" ActualRowsRead="1000" ActualEndOfScans="1" ActualExecutions="1" ActualElapsedms="9" ActualCPUms="9" ActualScans="1" ActualLogicalReads="42" ActualPhysicalReads="3" ActualReadAheads="40" ActualLobLogicalReads="0" ActualLobPhysicalReads="0" ActualExecutionMode="Row" />
                      </RunTimeInformation>
                      <IndexScan Ordered="1" ScanDirection="FORWARD" ForcedIndex="0" ForceSeek="0" ForceScan="0" NoExpandHint="0" Storage="RowStore">
                        <DefinedValues />
                        <Object Database="[Sales]" Schema="[dbo]" Table="[Orders]" Index="[PK_Orders]" IndexKind="Clustered" Storage="RowStore" />
                        <SeekPredicates>
                          <SeekPredicateNew>
                            <SeekKeys>
                              <StartRange ScanType="GE">
                                <RangeColumns>
                                  <ColumnReference Database="[Sales]" Schema="[dbo]" Table="[Orders]" Column="OrderID" />
                                </RangeColumns>
                                <RangeExpressions>
                                  <ScalarOperator ScalarString="[@from]" />
                                </RangeExpressions>
                              </StartRange>
                            </SeekKeys>
                          </SeekPredicateNew>
                        </SeekPredicates>
                      </IndexScan>
                    </RelOp>
                  </Sort>
                </RelOp>
                <ParameterList>
                  <ColumnReference Column="@from" ParameterDataType="int" ParameterCompiledValue="(1)" ParameterRuntimeValue="(49000)" />
                </ParameterList>
              </QueryPlan>
            </StmtSimple>
          </Statements>
        </Batch>
      </BatchSequence>
    </ShowPlanXML>
"#};

/// Two batches exercising statements without operators, a conditional with
/// branches, a scalar function plan and a cursor
pub(crate) const MIXED_BATCHES: &str = indoc! {r#"
    <ShowPlanXML xmlns="http://schemas.microsoft.com/sqlserver/2004/07/showplan" Version="1.564" Build="16.0.1000.6">
      <BatchSequence>
        <Batch>
          <Statements>
            <StmtUseDb StatementText="USE Sales" StatementId="1" StatementCompId="1" StatementType="USE DATABASE" Database="[Sales]" />
            <StmtSimple StatementText="SELECT dbo.fn_OrderTotal(42)" StatementId="2" StatementCompId="2" StatementType="SELECT" StatementSubTreeCost="0.0000011">
              <QueryPlan CachedPlanSize="16" CompileTime="1" CompileCPU="1" CompileMemory="104">
                <RelOp NodeId="0" PhysicalOp="Compute Scalar" LogicalOp="Compute Scalar" EstimateRows="1" EstimateIO="0" EstimateCPU="0.0000001" AvgRowSize="11" EstimatedTotalSubtreeCost="0.0000011" Parallel="0" EstimateRebinds="0" EstimateRewinds="0">
                  <ComputeScalar>
                    <DefinedValues />
                    <RelOp NodeId="1" PhysicalOp="Constant Scan" LogicalOp="Constant Scan" EstimateRows="1" EstimateIO="0" EstimateCPU="0.0000011" AvgRowSize="9" EstimatedTotalSubtreeCost="0.0000011" Parallel="0" EstimateRebinds="0" EstimateRewinds="0">
                      <ConstantScan />
                    </RelOp>
                  </ComputeScalar>
                </RelOp>
              </QueryPlan>
              <UDF ProcName="[Sales].[dbo].[fn_OrderTotal]">
                <Statements>
                  <StmtSimple StatementText="RETURN (SELECT SUM(Total) FROM dbo.OrderLines WHERE OrderID = @id)" StatementId="3" StatementCompId="3" StatementType="SELECT" StatementSubTreeCost="0.0065704">
                    <QueryPlan CachedPlanSize="24" CompileTime="1" CompileCPU="1" CompileMemory="160">
                      <MissingIndexes>
                        <MissingIndexGroup Impact="91.2">
                          <MissingIndex Database="[Sales]" Schema="[dbo]" Table="[OrderLines]">
                            <ColumnGroup Usage="EQUALITY">
                              <Column Name="[OrderID]" ColumnId="1" />
                            </ColumnGroup>
                          </MissingIndex>
                        </MissingIndexGroup>
                      </MissingIndexes>
                      <RelOp NodeId="0" PhysicalOp="Stream Aggregate" LogicalOp="Aggregate" EstimateRows="1" EstimateIO="0" EstimateCPU="0.0000011" AvgRowSize="15" EstimatedTotalSubtreeCost="0.0065704" Parallel="0" EstimateRebinds="0" EstimateRewinds="0">
                        <StreamAggregate>
                          <DefinedValues />
                          <RelOp NodeId="1" PhysicalOp="Table Scan" LogicalOp="Table Scan" EstimateRows="4" EstimateIO="0.003125" EstimateCPU="0.0001624" AvgRowSize="15" EstimatedTotalSubtreeCost="0.0032874" TableCardinality="40" Parallel="0" EstimateRebinds="0" EstimateRewinds="0">
                            <TableScan Ordered="0" ForcedIndex="0" ForceScan="0" NoExpandHint="0" Storage="RowStore">
                              <DefinedValues />
                              <Object Database="[Sales]" Schema="[dbo]" Table="[OrderLines]" IndexKind="Heap" Storage="RowStore" />
                            </TableScan>
                          </RelOp>
                        </StreamAggregate>
                      </RelOp>
                    </QueryPlan>
                  </StmtSimple>
                </Statements>
              </UDF>
            </StmtSimple>
            <StmtCond StatementText="IF EXISTS (SELECT 1 FROM dbo.Orders WHERE Total &gt; 1000)" StatementId="4" StatementCompId="4" StatementType="COND WITH QUERY" StatementSubTreeCost="0.0032942">
              <Condition>
                <QueryPlan CachedPlanSize="24" CompileTime="1" CompileCPU="1" CompileMemory="144">
                  <RelOp NodeId="0" PhysicalOp="Compute Scalar" LogicalOp="Compute Scalar" EstimateRows="1" EstimateIO="0" EstimateCPU="0.0000001" AvgRowSize="11" EstimatedTotalSubtreeCost="0.0032942" Parallel="0" EstimateRebinds="0" EstimateRewinds="0">
                    <ComputeScalar>
                      <DefinedValues />
                      <RelOp NodeId="1" PhysicalOp="Table Scan" LogicalOp="Table Scan" EstimateRows="1" EstimateIO="0.003125" EstimateCPU="0.0001581" AvgRowSize="9" EstimatedTotalSubtreeCost="0.0032831" TableCardinality="7" Parallel="0" EstimateRebinds="0" EstimateRewinds="0">
                        <TableScan Ordered="0" ForcedIndex="0" ForceScan="0" NoExpandHint="0" Storage="RowStore">
                          <DefinedValues />
                          <Object Database="[Sales]" Schema="[dbo]" Table="[Orders]" IndexKind="Heap" Storage="RowStore" />
                          <Predicate>
                            <ScalarOperator ScalarString="[Sales].[dbo].[Orders].[Total]&gt;(1000)" />
                          </Predicate>
                        </TableScan>
                      </RelOp>
                    </ComputeScalar>
                  </RelOp>
                </QueryPlan>
              </Condition>
              <Then>
                <Statements>
                  <StmtSimple StatementText="SELECT TOP 1 OrderID FROM dbo.Orders" StatementId="5" StatementCompId="5" StatementType="SELECT" StatementSubTreeCost="0.0032842">
                    <QueryPlan CachedPlanSize="16" CompileTime="0" CompileCPU="0" CompileMemory="96">
                      <RelOp NodeId="0" PhysicalOp="Top" LogicalOp="Top" EstimateRows="1" EstimateIO="0" EstimateCPU="0.0000001" AvgRowSize="11" EstimatedTotalSubtreeCost="0.0032842" Parallel="0" EstimateRebinds="0" EstimateRewinds="0">
                        <Top RowCount="0" IsPercent="0" WithTies="0">
                          <RelOp NodeId="1" PhysicalOp="Table Scan" LogicalOp="Table Scan" EstimateRows="1" EstimateIO="0.003125" EstimateCPU="0.0001581" AvgRowSize="11" EstimatedTotalSubtreeCost="0.0032831" TableCardinality="7" Parallel="0" EstimateRebinds="0" EstimateRewinds="0">
                            <TableScan Ordered="0" ForcedIndex="0" ForceScan="0" NoExpandHint="0" Storage="RowStore">
                              <DefinedValues />
                              <Object Database="[Sales]" Schema="[dbo]" Table="[Orders]" IndexKind="Heap" Storage="RowStore" />
                            </TableScan>
                          </RelOp>
                        </Top>
                      </RelOp>
                    </QueryPlan>
                  </StmtSimple>
                </Statements>
              </Then>
              <Else>
                <Statements>
                  <StmtSimple StatementText="PRINT 'none'" StatementId="6" StatementCompId="6" StatementType="PRINT" />
                </Statements>
              </Else>
            </StmtCond>
          </Statements>
        </Batch>
        <Batch>
          <Statements>
            <StmtCursor StatementText="DECLARE order_cursor CURSOR FOR SELECT OrderID FROM dbo.Orders" StatementId="7" StatementCompId="7" StatementType="DECLARE CURSOR">
              <CursorPlan CursorName="order_cursor" CursorActualType="Dynamic" CursorRequestedType="Dynamic" CursorConcurrency="Optimistic" ForwardOnly="false">
                <Operation OperationType="PopulateQuery">
                  <QueryPlan CachedPlanSize="8" />
                </Operation>
                <Operation OperationType="FetchQuery">
                  <QueryPlan CachedPlanSize="16" CompileTime="1" CompileCPU="1" CompileMemory="120">
                    <RelOp NodeId="0" PhysicalOp="Clustered Index Scan" LogicalOp="Clustered Index Scan" EstimateRows="1" EstimateIO="0.003125" EstimateCPU="0.0000796" AvgRowSize="11" EstimatedTotalSubtreeCost="0.0032046" TableCardinality="7" Parallel="0" EstimateRebinds="0" EstimateRewinds="0">
                      <IndexScan Ordered="1" ScanDirection="FORWARD" ForcedIndex="0" ForceScan="0" NoExpandHint="0" Storage="RowStore">
                        <DefinedValues />
                        <Object Database="[Sales]" Schema="[dbo]" Table="[Orders]" Index="[PK_Orders]" IndexKind="Clustered" Storage="RowStore" />
                      </IndexScan>
                    </RelOp>
                  </QueryPlan>
                </Operation>
              </CursorPlan>
            </StmtCursor>
          </Statements>
        </Batch>
      </BatchSequence>
    </ShowPlanXML>
"#};
